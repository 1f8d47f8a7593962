pub mod chain;
pub mod init;
pub mod serve;
pub mod status;
pub mod wallet;
