pub mod scripting;
pub mod stroke;
