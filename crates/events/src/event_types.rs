/// One event type or several, as accepted by registry operations.
pub trait IntoEventTypes {
    fn into_event_types(self) -> Vec<String>;
}

impl IntoEventTypes for &str {
    fn into_event_types(self) -> Vec<String> {
        vec![self.to_owned()]
    }
}

impl IntoEventTypes for String {
    fn into_event_types(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoEventTypes for &String {
    fn into_event_types(self) -> Vec<String> {
        vec![self.clone()]
    }
}

impl IntoEventTypes for &[&str] {
    fn into_event_types(self) -> Vec<String> {
        self.iter().map(|t| (*t).to_owned()).collect()
    }
}

impl IntoEventTypes for &[String] {
    fn into_event_types(self) -> Vec<String> {
        self.to_vec()
    }
}

impl<const N: usize> IntoEventTypes for [&str; N] {
    fn into_event_types(self) -> Vec<String> {
        self.iter().map(|t| (*t).to_owned()).collect()
    }
}

impl IntoEventTypes for Vec<&str> {
    fn into_event_types(self) -> Vec<String> {
        self.into_iter().map(str::to_owned).collect()
    }
}

impl IntoEventTypes for Vec<String> {
    fn into_event_types(self) -> Vec<String> {
        self
    }
}
