use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "songplays")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub songplay_id: i32,
    pub start_time: DateTime,
    pub user_id: i64,
    pub level: String,
    /// Null when no loaded song matched the event's (title, artist, duration)
    pub song_id: Option<String>,
    pub artist_id: Option<String>,
    pub session_id: i64,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
