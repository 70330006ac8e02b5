use sea_orm::entity::prelude::*;

/// Calendar breakdown of a play's start time, in UTC.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "time")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub start_time: DateTime,
    pub hour: i32,
    pub day: i32,
    /// ISO week of year
    pub week: i32,
    pub month: i32,
    pub year: i32,
    /// Monday = 0 .. Sunday = 6
    pub weekday: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
