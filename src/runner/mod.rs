pub mod ds;
pub mod plugin;
