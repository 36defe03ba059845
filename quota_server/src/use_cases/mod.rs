// Use cases layer: guest and member generation, limit lookups.

pub mod generate;
pub mod limits;
pub mod member;

#[cfg(test)]
pub(crate) mod test_support;
