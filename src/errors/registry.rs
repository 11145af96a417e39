use crate::any::TypeInfo;

#[derive(thiserror::Error, Debug)]
pub enum RegistrationErrorKind {
    #[error("Missing dependency annotation for parameter `{parameter}` of {service}")]
    MissingDependencyAnnotation { parameter: &'static str, service: TypeInfo },
}
