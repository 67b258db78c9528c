

#[cfg(test)]
mod dictionary;
