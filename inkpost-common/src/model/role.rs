use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt::Display};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    CanWritePosts,
    CanLike,
    CanLogin,
    CanRegister,
    CanUploadFiles,
}

impl Permission {
    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            Permission::CanWritePosts => "CAN_WRITE_POSTS",
            Permission::CanLike => "CAN_LIKE",
            Permission::CanLogin => "CAN_LOGIN",
            Permission::CanRegister => "CAN_REGISTER",
            Permission::CanUploadFiles => "CAN_UPLOAD_FILES",
        }
    }
}

impl Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Serialize, Deserialize)]
pub struct Role {
    #[serde(default)]
    pub permissions: BTreeSet<Permission>,
}

impl Role {
    #[must_use]
    pub fn allows(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}
