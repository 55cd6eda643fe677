use crate::registry::RegistryBuilder;

/// A named group of related mapping definitions.
///
/// ```rust,ignore
/// struct OrderProfile;
///
/// impl Profile for OrderProfile {
///     fn configure(&self, maps: &mut RegistryBuilder) {
///         maps.create_map("Order", "OrderDto").reverse_map();
///     }
/// }
/// ```
pub trait Profile: Send + Sync {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn configure(&self, maps: &mut RegistryBuilder);
}

/// Profile backed by a closure. See [`profile_fn`].
pub struct FnProfile<F> {
    name: String,
    configure: F,
}

impl<F> Profile for FnProfile<F>
where
    F: Fn(&mut RegistryBuilder) + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn configure(&self, maps: &mut RegistryBuilder) {
        (self.configure)(maps)
    }
}

pub fn profile_fn<F>(name: impl Into<String>, configure: F) -> FnProfile<F>
where
    F: Fn(&mut RegistryBuilder) + Send + Sync,
{
    FnProfile {
        name: name.into(),
        configure,
    }
}
