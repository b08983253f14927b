mod crud;
mod helpers;
mod prelude;
mod users;

pub use crud::{
    create_organization, delete_organization, get_organization, list_organizations,
    update_organization,
};
pub use users::{add_organization_user, list_organization_users};
