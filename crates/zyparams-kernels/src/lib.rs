pub mod bessel;
pub mod conductor;
pub mod earth_return;
pub mod insulation;

pub use conductor::{scaled_bessel, simplified, Annulus, ConductorImpedance};
pub use earth_return::{p_earth_return, z_earth_return, EarthGeometry, LayerMaterial};
pub use insulation::{p_ins, z_ins};
