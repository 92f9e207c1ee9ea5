pub mod frankfurter;
pub mod open_er_api;
pub mod rest_countries;
pub mod util;

pub use frankfurter::FrankfurterProvider;
pub use open_er_api::OpenErApiProvider;
pub use rest_countries::RestCountriesProvider;
pub use util::HttpSettings;
