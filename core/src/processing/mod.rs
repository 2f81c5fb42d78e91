pub mod binned;
pub mod radial;
pub mod shift;

pub use binned::{bin_2d, bin_2d_many, BinnedGrid};
pub use radial::{
    profile, profiles, radial_distance_map, ProfileConfig, RadialProfile, RadialProfiles,
};
pub use shift::shift;
