pub mod emr;

pub use emr::{EmrClient, EmrClientError};
