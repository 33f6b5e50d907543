//! Executors: CRUD, versions, soft delete and globals, each over a borrowed connection.

mod crud;
mod globals;
mod soft_delete;
mod versions;

pub use crud::CrudService;
pub use globals::GlobalsService;
pub use soft_delete::SoftDeleteService;
pub use versions::VersionService;
