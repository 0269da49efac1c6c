//! CLI commands module.

mod speaker;
mod trial;
mod ubm;
mod util;

pub use speaker::{AdaptCommand, EnrollCommand, SpeakersCommand};
pub use trial::{IdentifyCommand, VerifyCommand};
pub use ubm::TrainUbmCommand;

pub(crate) use util::*;
