pub mod locale;

pub use locale::{EnvLanguageSource, LocaleManager, SystemLanguageSource};
