pub mod organization;
pub use self::organization::{
    CreateOrganizationRequest, Metadata, OrgRole, OrganizationEntity, OrganizationResource, Page,
};
pub mod space;
pub use self::space::{SpaceEntity, SpaceRequest, SpaceResource};
pub mod user;
pub use self::user::{CreateUserRequest, ScimEmail, ScimUser, ScimUserList};
pub mod token;
pub use self::token::PasswordTokenResponse;
