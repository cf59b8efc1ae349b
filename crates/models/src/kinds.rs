//! String-backed enums stored in status/role/kind columns.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle of friendship and group requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum RequestStatus {
    #[sea_orm(string_value = "Pendiente")]
    Pendiente,
    #[sea_orm(string_value = "Aceptado")]
    Aceptado,
    #[sea_orm(string_value = "Rechazado")]
    Rechazado,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RequestStatus::Pendiente)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum ParticipantRole {
    #[sea_orm(string_value = "Administrador")]
    Administrador,
    #[sea_orm(string_value = "Membre")]
    Membre,
    #[sea_orm(string_value = "Creador")]
    Creador,
}

impl ParticipantRole {
    /// Creators and admins may review requests and send invitations.
    pub fn can_manage(self) -> bool {
        matches!(self, ParticipantRole::Administrador | ParticipantRole::Creador)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum ChatKind {
    #[sea_orm(string_value = "EventChat")]
    EventChat,
    #[sea_orm(string_value = "GroupChat")]
    GroupChat,
    #[sea_orm(string_value = "PrivateChat")]
    PrivateChat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum FileKind {
    #[sea_orm(string_value = "Image")]
    Image,
    #[sea_orm(string_value = "Video")]
    Video,
    #[sea_orm(string_value = "Document")]
    Document,
}
