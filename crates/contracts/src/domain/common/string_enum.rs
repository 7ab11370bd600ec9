/// Declares a fieldless enum stored as a fixed string in the database and on
/// the wire.
#[macro_export]
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        $vis enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $text ),+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $text => Ok($name::$variant), )+
                    other => Err(format!("Unknown {} '{}'", stringify!($name), other)),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    crate::string_enum! {
        pub enum Shade {
            Light => "LIGHT",
            Dark => "DARK",
        }
    }

    #[test]
    fn parses_and_prints_the_same_text() {
        for shade in Shade::ALL {
            assert_eq!(shade.as_str().parse::<Shade>(), Ok(*shade));
        }
        assert_eq!(Shade::Dark.to_string(), "DARK");
        assert!("dark".parse::<Shade>().is_err());
    }

    #[test]
    fn serde_uses_the_stored_text() {
        assert_eq!(serde_json::to_string(&Shade::Light).unwrap(), "\"LIGHT\"");
        let parsed: Shade = serde_json::from_str("\"DARK\"").unwrap();
        assert_eq!(parsed, Shade::Dark);
    }
}
