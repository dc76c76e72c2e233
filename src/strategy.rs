//! The queuing-strategy contract. Generalizes the teacher's
//! `queuing_strategy::QueuingStrategy::new(high_water_mark)`, which only
//! ever sets a JS-side high water mark, to also carry an optional Rust
//! `size` closure.

use crate::error::ContractError;

/// `{high_water_mark, size?}`. Constructing a strategy with `size` is
/// how an embedder gives the queue a non-uniform cost per chunk; without
/// one, every chunk counts as size `1`.
pub struct QueuingStrategy<W, E> {
    pub(crate) high_water_mark: f64,
    pub(crate) size: Option<Box<dyn Fn(&W) -> Result<f64, E>>>,
}

impl<W, E> QueuingStrategy<W, E> {
    /// A strategy where every chunk has size 1.
    pub fn new(high_water_mark: f64) -> Result<Self, ContractError> {
        Self::validate_hwm(high_water_mark)?;
        Ok(Self {
            high_water_mark,
            size: None,
        })
    }

    /// A strategy with a custom per-chunk size function. The function may
    /// fail; a failure errors the stream.
    pub fn with_size(
        high_water_mark: f64,
        size: impl Fn(&W) -> Result<f64, E> + 'static,
    ) -> Result<Self, ContractError> {
        Self::validate_hwm(high_water_mark)?;
        Ok(Self {
            high_water_mark,
            size: Some(Box::new(size)),
        })
    }

    fn validate_hwm(hwm: f64) -> Result<(), ContractError> {
        if !hwm.is_finite() || hwm < 0.0 {
            return Err(ContractError::InvalidStrategy(
                "high_water_mark must be a non-negative, finite number",
            ));
        }
        Ok(())
    }

    pub(crate) fn compute_size(&self, chunk: &W) -> Result<f64, E> {
        match &self.size {
            Some(f) => f(chunk),
            None => Ok(1.0),
        }
    }
}
