pub mod http;
pub mod mock;

pub use http::HttpDocumentService;
pub use mock::MockDocumentService;
