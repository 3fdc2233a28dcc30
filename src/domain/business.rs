/// A business known to the in-process directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Business {
    pub id: String,
    pub name: String,
    pub active: bool,
}

/// Payload for registering a business.
#[derive(Debug, Clone)]
pub struct BusinessCreate {
    pub name: String,
}

/// Payload for updating a business.
#[derive(Debug, Clone, Default)]
pub struct BusinessPatch {
    pub name: Option<String>,
    pub active: Option<bool>,
}
