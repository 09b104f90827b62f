pub mod memory;
pub mod references;
pub mod xlsx;

pub use memory::MemoryWorkbook;
pub use xlsx::{SheetIdentity, XlsxWorkbook};
