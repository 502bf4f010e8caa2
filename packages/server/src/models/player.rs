use serde::{Deserialize, Serialize};

use super::role::Role;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Player {
    pub id: String, // 接続ID（セッション中は不変）
    pub name: String,
    pub role: Option<Role>,
    pub is_alive: bool,
}

/// クライアントに公開するプレイヤー情報（役職は含めない）
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PlayerListItem {
    pub id: String,
    pub name: String,
}

impl Player {
    pub fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            role: None,
            is_alive: true,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == Some(role)
    }

    pub fn is_werewolf(&self) -> bool {
        self.has_role(Role::Werewolf)
    }

    // 生存フラグは true -> false の一方向のみ
    pub(crate) fn kill(&mut self) {
        self.is_alive = false;
    }

    pub fn list_item(&self) -> PlayerListItem {
        PlayerListItem {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}
