//! Integration tests for tokenchain tokens.


#[cfg(test)]
mod address_tests;
#[cfg(test)]
mod aggregator_tests;
#[cfg(test)]
mod core_tests;
#[cfg(test)]
mod factory_tests;
#[cfg(test)]
mod predicate_tests;
#[cfg(test)]
mod token_tests;
