use crate::actor_framework::Entity;
use crate::domain::{Business, BusinessCreate, BusinessPatch};

impl Entity for Business {
    type Id = String;
    type CreateParams = BusinessCreate;
    type Patch = BusinessPatch;
    type Action = ();
    type ActionResult = ();
    type Filter = ();

    fn id(&self) -> &String {
        &self.id
    }

    /// Registers a new, active Business.
    fn from_create_params(id: String, params: BusinessCreate) -> Result<Self, String> {
        if params.name.trim().is_empty() {
            return Err("business name is required".to_string());
        }
        Ok(Self {
            id,
            name: params.name,
            active: true,
        })
    }

    /// Updates the business name and/or active flag.
    fn on_update(&mut self, patch: BusinessPatch) -> Result<(), String> {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(active) = patch.active {
            self.active = active;
        }
        Ok(())
    }

    fn handle_action(&mut self, _action: ()) -> Result<(), String> {
        Ok(())
    }
}
