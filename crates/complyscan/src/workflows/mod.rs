pub mod leads;
pub mod scan;
