/// Declare a descriptor newtype over [`crate::api::descriptor::EntityDescriptor`].
///
/// Every pluggable behavior is named the same way, but the types are kept apart so a
/// processor can never be passed where an input is expected.
macro_rules! descriptor {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
        pub struct $name(crate::api::descriptor::EntityDescriptor);

        impl $name {
            pub fn new(class_name: &str) -> Self {
                $name(crate::api::descriptor::EntityDescriptor::new(class_name))
            }

            pub fn with_payload(class_name: &str, payload: Vec<u8>) -> Self {
                $name(crate::api::descriptor::EntityDescriptor::with_payload(
                    class_name, payload,
                ))
            }

            pub fn set_user_payload(mut self, payload: Option<Vec<u8>>) -> Self {
                self.0.user_payload = payload;
                self
            }
        }

        impl std::ops::Deref for $name {
            type Target = crate::api::descriptor::EntityDescriptor;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0.class_name)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    descriptor!(
        /// test only
        SampleDescriptor
    );

    #[test]
    pub fn descriptor_macro_test() {
        let d = SampleDescriptor::with_payload("a.b.C", vec![1, 2]);
        assert_eq!(d.class_name(), "a.b.C");
        assert_eq!(d.user_payload(), Some(&[1u8, 2][..]));
        assert_eq!(d.to_string(), "SampleDescriptor(a.b.C)");

        let d = d.set_user_payload(None);
        assert!(d.user_payload().is_none());
        assert_eq!(d, SampleDescriptor::new("a.b.C"));
    }
}
