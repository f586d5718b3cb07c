//! Marker types.

/// Marker type describing an entity creation.
#[derive(Clone, Copy, Debug)]
pub struct Creation;

/// Marker type describing a deadline an entity is due by.
#[derive(Clone, Copy, Debug)]
pub struct Due;

/// Marker type describing an entity being handed back.
#[derive(Clone, Copy, Debug)]
pub struct Return;
