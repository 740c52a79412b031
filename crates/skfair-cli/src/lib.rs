pub mod classifiers;
pub mod report;
pub mod util;
