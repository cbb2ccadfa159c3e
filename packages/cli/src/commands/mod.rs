pub mod catalog;
pub mod check;
pub mod init;
pub mod inspect;
pub mod run;
pub mod style;

pub use catalog::{catalog, CatalogArgs};
pub use check::{check, check_script, CheckArgs, CheckScriptArgs};
pub use init::{init, InitArgs};
pub use inspect::{inspect, InspectArgs};
pub use run::{run, RunArgs};
pub use style::{style, StyleArgs};
