//! Concrete splitting rules.

mod multi_fluxes;
mod snow_rain;

pub use multi_fluxes::MultiFluxesSplitter;
pub use snow_rain::SnowRainSplitter;
