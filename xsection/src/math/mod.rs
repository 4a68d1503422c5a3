mod mirror;

pub(crate) use mirror::ImplicitLine;
