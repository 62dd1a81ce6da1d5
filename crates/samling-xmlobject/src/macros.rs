#![forbid(unsafe_code)]

/// Declare a node type whose only content is a text value.
///
/// ```ignore
/// text_element!(
///     /// The audience URI.
///     Audience, ns::SAML2, "Audience", ns::prefix::SAML2
/// );
/// ```
#[macro_export]
macro_rules! text_element {
    ($(#[$meta:meta])* $name:ident, $ns:expr, $local:expr, $prefix:expr) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name {
            base: $crate::XmlObjectBase,
            value: ::std::option::Option<::std::string::String>,
        }

        impl $name {
            pub fn value(&self) -> ::std::option::Option<&str> {
                self.value.as_deref()
            }

            pub fn set_value(&mut self, value: ::std::option::Option<&str>) {
                self.base.assign(&mut self.value, value.map(str::to_owned));
            }
        }

        impl $crate::XmlObject for $name {
            fn base(&self) -> &$crate::XmlObjectBase {
                &self.base
            }

            fn base_mut(&mut self) -> &mut $crate::XmlObjectBase {
                &mut self.base
            }

            fn marshall_content(
                &self,
                element: &$crate::__private::Element,
            ) -> $crate::__private::Result<()> {
                if let ::std::option::Option::Some(value) = &self.value {
                    element.set_text(value);
                }
                ::std::result::Result::Ok(())
            }

            fn process_content(&mut self, text: &str) -> $crate::__private::Result<()> {
                self.value = ::std::option::Option::Some(text.to_owned());
                ::std::result::Result::Ok(())
            }
        }

        impl $crate::XmlObjectType for $name {
            fn default_element_name() -> $crate::__private::QName {
                $crate::__private::QName::with_prefix($ns, $local, $prefix)
            }

            fn with_name(element_name: $crate::__private::QName) -> Self {
                Self {
                    base: $crate::XmlObjectBase::new(element_name),
                    value: ::std::option::Option::None,
                }
            }
        }
    };
}
