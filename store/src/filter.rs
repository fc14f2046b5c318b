//! Query filters understood by every store backend.

use regsync_types::UserRecord;

/// Selects which records a `find_all` returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordFilter {
    All,
    /// Records with a non-blank wallet address.
    HasWallet,
    /// Records that have not been given a reference number yet.
    MissingRefNumber,
    /// Records linked to a wallet-container object.
    HasWalletObject,
}

impl RecordFilter {
    pub fn matches(&self, record: &UserRecord) -> bool {
        match self {
            RecordFilter::All => true,
            RecordFilter::HasWallet => record.wallet().is_some(),
            RecordFilter::MissingRefNumber => record.ref_number.is_none(),
            RecordFilter::HasWalletObject => record.wallet_object_id.is_some(),
        }
    }

    /// The matching records of an already loaded collection, in order.
    pub fn select(self, records: &[UserRecord]) -> impl Iterator<Item = &UserRecord> {
        records.iter().filter(move |r| self.matches(r))
    }
}
