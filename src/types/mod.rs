//! Type register generation: serialized type names to runtime constructors.

mod register;

pub use register::{
    get_type_register_paths, ProjectInfo, RegisterPath, TypeImport, TypeRegisterGenerator,
    TypeRegisterInfo,
};
