//! Ride and participant status enums mapping to SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data (1-based) in the
//! corresponding `*_statuses` database table. Transition rules live here so
//! both store implementations enforce the same state machine.

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// All variants, in seed order.
            pub const ALL: &'static [$name] = &[ $( $name::$variant ),+ ];

            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Look up a variant by its database status ID.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some($name::$variant), )+
                    _ => None,
                }
            }

            /// The canonical wire name (e.g. `"PENDING"`).
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $label, )+
                }
            }

            /// Parse a wire name. Case-sensitive, upper-case only.
            pub fn parse_name(name: &str) -> Option<Self> {
                match name {
                    $( $label => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

define_status_enum! {
    /// Ride lifecycle status.
    RideStatus {
        Active = 1 => "ACTIVE",
        Completed = 2 => "COMPLETED",
        Cancelled = 3 => "CANCELLED",
    }
}

define_status_enum! {
    /// Participant booking status.
    ParticipantStatus {
        Pending = 1 => "PENDING",
        Confirmed = 2 => "CONFIRMED",
        Cancelled = 3 => "CANCELLED",
        Completed = 4 => "COMPLETED",
    }
}

impl RideStatus {
    /// A ride only ever leaves `Active`, and only for a terminal state.
    pub fn can_transition_to(self, to: RideStatus) -> bool {
        matches!(
            (self, to),
            (RideStatus::Active, RideStatus::Completed)
                | (RideStatus::Active, RideStatus::Cancelled)
        )
    }
}

impl ParticipantStatus {
    /// Allowed transitions: Pending -> {Confirmed, Cancelled},
    /// Confirmed -> {Cancelled, Completed}. Everything else is illegal.
    pub fn can_transition_to(self, to: ParticipantStatus) -> bool {
        use ParticipantStatus::*;
        matches!(
            (self, to),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Cancelled)
                | (Confirmed, Completed)
        )
    }

    /// Whether a booking in this status counts against ride capacity.
    pub fn holds_seats(self) -> bool {
        self != ParticipantStatus::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip() {
        for s in RideStatus::ALL {
            assert_eq!(RideStatus::from_id(s.id()), Some(*s));
        }
        for s in ParticipantStatus::ALL {
            assert_eq!(ParticipantStatus::from_id(s.id()), Some(*s));
        }
        assert_eq!(RideStatus::from_id(0), None);
        assert_eq!(ParticipantStatus::from_id(99), None);
    }

    #[test]
    fn test_name_roundtrip() {
        for s in ParticipantStatus::ALL {
            assert_eq!(ParticipantStatus::parse_name(s.as_str()), Some(*s));
        }
        assert_eq!(ParticipantStatus::parse_name("confirmed"), None);
        assert_eq!(ParticipantStatus::parse_name("UNKNOWN"), None);
    }

    #[test]
    fn test_ride_transitions_never_reverse() {
        use RideStatus::*;
        assert!(Active.can_transition_to(Completed));
        assert!(Active.can_transition_to(Cancelled));
        // Terminal states are dead ends.
        for from in [Completed, Cancelled] {
            for to in RideStatus::ALL {
                assert!(!from.can_transition_to(*to), "{from} -> {to} must be illegal");
            }
        }
        assert!(!Active.can_transition_to(Active));
    }

    #[test]
    fn test_participant_transition_table() {
        use ParticipantStatus::*;
        let legal = [
            (Pending, Confirmed),
            (Pending, Cancelled),
            (Confirmed, Cancelled),
            (Confirmed, Completed),
        ];
        for from in ParticipantStatus::ALL {
            for to in ParticipantStatus::ALL {
                let expected = legal.contains(&(*from, *to));
                assert_eq!(
                    from.can_transition_to(*to),
                    expected,
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_cancelled_frees_seats() {
        use ParticipantStatus::*;
        assert!(Pending.holds_seats());
        assert!(Confirmed.holds_seats());
        assert!(Completed.holds_seats());
        assert!(!Cancelled.holds_seats());
    }
}
