//! FIR band filtering: kernel design and band-power extraction.

pub mod apply;
pub mod design;

pub use apply::{band_power, convolve_same, variance};
pub use design::{design_bandpass, design_notch, firwin_lowpass, hamming, FilterBank};
