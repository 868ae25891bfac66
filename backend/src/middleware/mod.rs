/// Caller identity extraction
pub mod requester;

pub use requester::Requester;
