pub mod bcb_sgs;
pub mod util;

pub use bcb_sgs::SgsProvider;
