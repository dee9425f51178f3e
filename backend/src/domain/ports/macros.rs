//! `define_port_error!` declares an adapter-facing error enum.
//!
//! Every variant gets a snake_case constructor. Field parameters take
//! `impl Into<T>`, so adapters can hand over `&str` or driver errors that
//! convert into the stored type.

macro_rules! define_port_error {
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )? => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( { $($field : $ty),* } )?,
            )*
        }

        impl $name {
            $(
                ::paste::paste! {
                    #[doc = "Build a [`" $name "::" $variant "`]."]
                    pub fn [<$variant:snake>]($($($field: impl Into<$ty>),*)?) -> Self {
                        Self::$variant { $($($field: $field.into()),*)? }
                    }
                }
            )*
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    use rstest::rstest;

    define_port_error! {
        pub enum ProbePortError {
            Unreachable { message: String } => "store unreachable: {message}",
            Conflict => "row already claimed",
            Throttled { message: String, retry_after_secs: u64 } =>
                "throttled for {retry_after_secs}s: {message}",
        }
    }

    #[rstest]
    fn string_fields_accept_str() {
        assert_eq!(
            ProbePortError::unreachable("timeout").to_string(),
            "store unreachable: timeout"
        );
    }

    #[rstest]
    fn unit_variants_get_zero_argument_constructors() {
        assert_eq!(ProbePortError::conflict(), ProbePortError::Conflict);
    }

    #[rstest]
    fn mixed_fields_keep_their_types() {
        let err = ProbePortError::throttled("pool exhausted", 5_u64);
        assert_eq!(
            err,
            ProbePortError::Throttled {
                message: "pool exhausted".to_owned(),
                retry_after_secs: 5,
            }
        );
        assert_eq!(err.to_string(), "throttled for 5s: pool exhausted");
    }
}
