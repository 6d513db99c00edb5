pub mod extractor;
pub mod jwt;
pub mod response;
pub mod test_utils;
pub mod validation;
