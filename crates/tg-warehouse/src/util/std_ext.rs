use easy_ext::ext;

pub(crate) mod prelude {
    pub(crate) use super::ErrorExt as _;
    pub(crate) use super::F64Ext as _;
}

#[ext(ErrorExt)]
pub(crate) impl<E> E
where
    E: std::error::Error + ?Sized,
{
    fn display_chain(&self) -> display_error_chain::DisplayErrorChain<&Self> {
        display_error_chain::DisplayErrorChain::new(self)
    }
}

#[ext(F64Ext)]
pub(crate) impl f64 {
    /// Rounds the number to the given count of decimal places
    fn round_to(self, decimals: i32) -> f64 {
        let factor = 10_f64.powi(decimals);
        (self * factor).round() / factor
    }
}
