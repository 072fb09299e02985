use super::{Relu, Sigmoid};

/// The activation function applied element-wise after a dense layer.
#[derive(Clone, Copy, Debug)]
pub enum ActFn {
    Relu(Relu),
    Sigmoid(Sigmoid),
}
use ActFn::*;

impl ActFn {
    pub fn relu() -> Self {
        Relu(Relu::new())
    }

    pub fn sigmoid(amp: f32) -> Self {
        Sigmoid(Sigmoid::new(amp))
    }

    pub fn f(&self, z: f32) -> f32 {
        match self {
            Relu(a) => a.f(z),
            Sigmoid(a) => a.f(z),
        }
    }

    pub fn df(&self, z: f32) -> f32 {
        match self {
            Relu(a) => a.df(z),
            Sigmoid(a) => a.df(z),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_to_the_wrapped_function() {
        let relu = ActFn::relu();
        assert!(matches!(relu, ActFn::Relu(_)));
        assert_eq!(relu.f(-1.), 0.);
        assert_eq!(relu.f(2.), 2.);
        assert_eq!(relu.df(2.), 1.);

        let sigmoid = ActFn::sigmoid(1.);
        assert!(matches!(sigmoid, ActFn::Sigmoid(_)));
        assert_eq!(sigmoid.f(0.), 0.5);
        assert_eq!(sigmoid.df(0.), 0.25);
    }
}
