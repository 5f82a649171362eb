mod dinner;
mod user;

pub use dinner::{Dinner, NewDinner, ProjectionError, PublicDinner};
pub use user::{PublicUser, SessionSource, Token, User};
