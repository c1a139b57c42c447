pub mod decode;
pub mod init;
pub mod run;

pub use decode::{decode, DecodeArgs};
pub use init::{init, InitArgs};
pub use run::{run, RunArgs};
