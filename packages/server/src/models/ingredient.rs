use serde::{Deserialize, Serialize};

#[derive(Serialize, utoipa::ToSchema)]
pub struct IngredientResponse {
    #[schema(example = 12)]
    pub id: i32,
    #[schema(example = "sugar")]
    pub name: String,
    #[schema(example = "g")]
    pub measurement_unit: String,
}

impl From<crate::entity::ingredient::Model> for IngredientResponse {
    fn from(m: crate::entity::ingredient::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            measurement_unit: m.measurement_unit,
        }
    }
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct IngredientListQuery {
    /// Case-insensitive substring filter on the ingredient name.
    pub name: Option<String>,
}
