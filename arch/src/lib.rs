pub mod io;
pub mod mode;
pub mod op;
pub mod psw;
pub mod reg;
