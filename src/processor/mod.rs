mod request;
mod response;

pub use request::RequestProcessor;
pub use response::ResponseProcessor;
