use anyhow::anyhow;

/// Connectivity represents the "connected" state of a fake driven port and provides
/// common behavior for returning an error if the port is configured to be in a disconnected state.
pub enum Connectivity {
    Connected,
    Disconnected,
}

impl Connectivity {
    /// Return an error if connectivity is in a "disconnected" state
    pub fn blow_up_if_disconnected(&self) -> Result<(), anyhow::Error> {
        match self {
            Self::Connected => Ok(()),
            Self::Disconnected => Err(anyhow!("could not connect to storage!")),
        }
    }
}

/// FakeImplementation stands in for one function of a mocked driving port. It records the
/// arguments of every call and hands back a preconfigured return value, which is simpler than
/// getting mocking libraries to cooperate with `async fn` in traits.
///
/// * `Args` is whatever the fake captures per call (usually a tuple of the interesting arguments)
/// * `Ret` is the function's return type
///
/// Mocks hold one of these per trait function inside a `Mutex` so the interior can be mutated
/// through the `&self` receiver:
///
/// ```ignore
/// impl SettingsPort for Mutex<MockSettingsService> {
///     async fn settings_for_user(&self, user_id: i64, /* ... */) -> Result<Option<UserSettings>, SettingsError> {
///         let mut locked_self = self.lock().unwrap();
///         locked_self.settings_for_user_result.save_arguments(user_id);
///         locked_self.settings_for_user_result.return_value_result()
///     }
/// }
/// ```
pub struct FakeImplementation<Args, Ret> {
    saved_arguments: Vec<Args>,
    return_value: Option<Ret>,
}

impl<Args, Ret> FakeImplementation<Args, Ret> {
    pub fn new() -> FakeImplementation<Args, Ret> {
        FakeImplementation {
            saved_arguments: Vec::new(),
            return_value: None,
        }
    }

    /// Saves arguments from a single invocation of the FakeImplementation
    pub fn save_arguments(&mut self, arguments: Args) {
        self.saved_arguments.push(arguments)
    }

    /// Returns the list of arguments passed on every call to this FakeImplementation
    pub fn calls(&self) -> &[Args] {
        self.saved_arguments.as_slice()
    }
}

impl<Args, Success, Fail> FakeImplementation<Args, Result<Success, Fail>>
where
    Success: Clone,
    Fail: Clone,
{
    /// Set the result that should be returned when this FakeImplementation is invoked
    pub fn set_returned_result(&mut self, return_value: Result<Success, Fail>) {
        self.return_value = Some(return_value)
    }

    /// Retrieve a copy of the configured result. Panics if no result was configured, since
    /// that means the test called something it didn't expect to.
    pub fn return_value_result(&self) -> Result<Success, Fail> {
        match self.return_value {
            Some(Ok(ref ok_result)) => Ok(ok_result.clone()),
            Some(Err(ref err)) => Err(err.clone()),
            None => panic!("Tried to return from a function where the return value wasn't set!"),
        }
    }
}
