pub mod pages;
pub mod types;

pub use pages::{parse_page_urls, ParseError};
pub use types::{FinalizeForm, MessageResponse, OtpSendForm, OtpVerifyForm, SignatureRequestId};
