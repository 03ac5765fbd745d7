//! Shared domain enums stored as lowercase text columns

use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, Postgres};
use utoipa::ToSchema;

/// Declares a text-backed enum with `as_str`/`FromStr`/`Display` and the SQLx
/// conversions needed to bind it and read it back from a TEXT column.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(format!("Invalid {} value: {}", stringify!($name), s)),
                }
            }
        }

        impl sqlx::Type<Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<Postgres>>::compatible(ty)
            }
        }

        impl<'r> Decode<'r, Postgres> for $name {
            fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
                let s: String = Decode::<Postgres>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl Encode<'_, Postgres> for $name {
            fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
                let s: String = self.as_str().to_string();
                <String as Encode<Postgres>>::encode(s, buf)
            }
        }
    };
}

text_enum! {
    /// Which role profile a user currently holds
    RoleKind {
        Librarian => "librarian",
        Patron => "patron",
    }
}

text_enum! {
    /// Garment size
    Size {
        Xs => "xs",
        S => "s",
        M => "m",
        L => "l",
        Xl => "xl",
        Xxl => "xxl",
    }
}

text_enum! {
    /// Physical condition of a garment
    Condition {
        New => "new",
        LikeNew => "like_new",
        Good => "good",
        Fair => "fair",
        Worn => "worn",
    }
}

text_enum! {
    /// Lifecycle of a borrow request
    LendingStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
        Returned => "returned",
    }
}

text_enum! {
    /// Lifecycle of a private-collection access request
    InviteStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_round_trip_matches_serde() {
        assert_eq!(Condition::LikeNew.as_str(), "like_new");
        assert_eq!(
            serde_json::to_value(Condition::LikeNew).unwrap(),
            serde_json::json!("like_new")
        );
        assert_eq!(serde_json::to_value(Size::Xxl).unwrap(), serde_json::json!("xxl"));
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("PENDING".parse::<LendingStatus>(), Ok(LendingStatus::Pending));
        assert_eq!("Librarian".parse::<RoleKind>(), Ok(RoleKind::Librarian));
        assert!("lost".parse::<LendingStatus>().is_err());
    }
}
